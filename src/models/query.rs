//! Query parameters shared by every location of a run

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_COMMUNITY: &str = "RE";
pub const DEFAULT_PARAMETERS: &str = "ALLSKY_SFC_SW_DWN,ALLSKY_SFC_SW_DNI,ALLSKY_SFC_SW_DIFF,SZA,ALLSKY_KT,T2M,PS,WS10M,WS50M,WD10M,WD50M";
pub const DEFAULT_FORMAT: &str = "CSV";
pub const DEFAULT_THEME: &str = "dark";
pub const DEFAULT_USER: &str = "DAVE";
pub const DEFAULT_TIME_STANDARD: &str = "LST";

#[must_use]
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default()
}

#[must_use]
pub fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default()
}

/// Dates as the POWER API expects them (`yyyyMMdd`)
#[must_use]
pub fn format_power_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Editable form state. Dates may be unset; everything else falls back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryForm {
    #[serde(default = "some_start_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default = "some_end_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default = "default_parameters")]
    pub parameters: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_time_standard")]
    pub time_standard: String,
}

fn some_start_date() -> Option<NaiveDate> {
    Some(default_start_date())
}

fn some_end_date() -> Option<NaiveDate> {
    Some(default_end_date())
}

fn default_community() -> String {
    DEFAULT_COMMUNITY.to_string()
}

fn default_parameters() -> String {
    DEFAULT_PARAMETERS.to_string()
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

fn default_time_standard() -> String {
    DEFAULT_TIME_STANDARD.to_string()
}

impl Default for QueryForm {
    fn default() -> Self {
        Self {
            start_date: some_start_date(),
            end_date: some_end_date(),
            community: default_community(),
            parameters: default_parameters(),
            format: default_format(),
            theme: default_theme(),
            user: default_user(),
            time_standard: default_time_standard(),
        }
    }
}

/// Immutable snapshot of the form taken at submission time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParameters {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub community: String,
    pub parameters: String,
    pub format: String,
    pub theme: String,
    pub user: String,
    pub time_standard: String,
}

impl QueryParameters {
    /// Parameters with the default form values and the given date range
    #[must_use]
    pub fn with_dates(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let form = QueryForm::default();
        Self {
            start_date,
            end_date,
            community: form.community,
            parameters: form.parameters,
            format: form.format,
            theme: form.theme,
            user: form.user,
            time_standard: form.time_standard,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_date > self.end_date {
            return Err(ValidationError::InvertedDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }

    /// Query pairs for the POWER point endpoint, coordinates excluded
    #[must_use]
    pub fn power_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("start", format_power_date(self.start_date)),
            ("end", format_power_date(self.end_date)),
            ("community", self.community.clone()),
            ("parameters", self.parameters.clone()),
            ("format", self.format.clone()),
            ("theme", self.theme.clone()),
            ("user", self.user.clone()),
            ("time-standard", self.time_standard.clone()),
        ]
    }
}

impl TryFrom<QueryForm> for QueryParameters {
    type Error = ValidationError;

    fn try_from(form: QueryForm) -> Result<Self, Self::Error> {
        let (Some(start_date), Some(end_date)) = (form.start_date, form.end_date) else {
            return Err(ValidationError::MissingDates);
        };
        let params = Self {
            start_date,
            end_date,
            community: form.community,
            parameters: form.parameters,
            format: form.format,
            theme: form.theme,
            user: form.user,
            time_standard: form.time_standard,
        };
        params.validate()?;
        Ok(params)
    }
}
