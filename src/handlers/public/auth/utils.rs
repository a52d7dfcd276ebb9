use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::DomainError;

/// Unwrap a JSON body, turning extractor rejections into `InvalidJson`.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, DomainError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!("rejected request body: {}", rejection.body_text());
            Err(DomainError::InvalidJson(rejection.body_text()))
        }
    }
}

/// Collects missing and malformed fields so a request reports all of them at once.
#[derive(Debug, Default)]
pub struct Fields {
    missing: Vec<String>,
    invalid: Vec<String>,
}

impl Fields {
    /// Trimmed value of a required field.
    pub fn required(&mut self, name: &str, value: Option<String>) -> String {
        let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
        if value.is_empty() {
            self.missing.push(name.to_string());
        }
        value
    }

    /// Required secret, kept exactly as sent.
    pub fn secret(&mut self, name: &str, value: Option<String>) -> String {
        match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.missing.push(name.to_string());
                String::new()
            }
        }
    }

    /// Required email, lowercased.
    pub fn email(&mut self, name: &str, value: Option<String>) -> String {
        let value = self.required(name, value).to_lowercase();
        if !value.is_empty() && !is_valid_email(&value) {
            self.invalid.push(name.to_string());
        }
        value
    }

    /// Missing fields are reported before malformed ones.
    pub fn finish(self) -> Result<(), DomainError> {
        if let Some(err) = DomainError::from_fields(self.missing, true) {
            return Err(err);
        }
        match DomainError::from_fields(self.invalid, false) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn optional(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, DomainError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(timestamp.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Some(Utc.from_utc_datetime(&midnight)))
        .ok_or_else(|| DomainError::InvalidDate(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@mail.airline.co"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@@x.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("ax.com"));
    }

    #[test]
    fn dates_accept_both_formats() {
        let plain = parse_date("start_date", Some("2024-03-01")).unwrap().unwrap();
        assert_eq!(plain.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let full = parse_date("start_date", Some("2024-03-01T08:30:00-05:00")).unwrap().unwrap();
        assert_eq!(full.to_rfc3339(), "2024-03-01T13:30:00+00:00");

        assert_eq!(parse_date("end_date", None).unwrap(), None);
        assert_eq!(parse_date("end_date", Some("  ")).unwrap(), None);
        assert!(matches!(
            parse_date("end_date", Some("01/03/2024")),
            Err(DomainError::InvalidDate(f)) if f == "end_date"
        ));
    }

    #[test]
    fn missing_fields_win_over_invalid() {
        let mut fields = Fields::default();
        fields.required("name", None);
        fields.email("email", Some("nope".into()));
        assert!(matches!(fields.finish(), Err(DomainError::MissingField(f)) if f == "name"));

        let mut fields = Fields::default();
        fields.required("name", Some(" ".into()));
        fields.secret("password", Some(String::new()));
        assert!(matches!(
            fields.finish(),
            Err(DomainError::InvalidFields(list)) if list == vec!["name".to_string(), "password".to_string()]
        ));
    }

    #[test]
    fn email_is_lowercased_and_secret_untouched() {
        let mut fields = Fields::default();
        assert_eq!(fields.email("email", Some(" A@X.com ".into())), "a@x.com");
        assert_eq!(fields.secret("password", Some(" p ".into())), " p ");
        assert!(fields.finish().is_ok());
    }
}
