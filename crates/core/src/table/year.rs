use serde::{Deserialize, Serialize};

/// How year columns are labelled in CSV headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearLabelStyle {
    /// `2019`
    #[default]
    Integer,
    /// `2019.0`, the float-typed label older dashboards match on
    Decimal,
}

impl YearLabelStyle {
    pub fn format(&self, year: i32) -> String {
        match self {
            YearLabelStyle::Integer => year.to_string(),
            YearLabelStyle::Decimal => format!("{}.0", year),
        }
    }
}

/// Recognize a year column label in either style.
///
/// Only four-digit years qualify, so indicator columns such as
/// `PIB per capita 2021` are never mistaken for year columns.
pub fn parse_year_label(label: &str) -> Option<i32> {
    let t = label.trim();
    let digits = t.strip_suffix(".0").unwrap_or(t);
    if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(YearLabelStyle::Integer.format(2019), "2019");
        assert_eq!(YearLabelStyle::Decimal.format(2019), "2019.0");
        assert_eq!(parse_year_label("2019"), Some(2019));
        assert_eq!(parse_year_label("2019.0"), Some(2019));
        assert_eq!(parse_year_label("2019.5"), None);
        assert_eq!(parse_year_label("PIB per capita 2021"), None);
        assert_eq!(parse_year_label("total_km2"), None);
    }
}
