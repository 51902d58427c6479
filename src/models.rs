use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;
use crate::services::census::Sheet;

/// How a category's sheet is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Flat,
    Banded,
}

/// Census categories, in the order the exported workbook lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    OpdTime,
    OpdSpecial,
    OpdPremium,
    Ipd,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::OpdTime,
        Category::OpdSpecial,
        Category::OpdPremium,
        Category::Ipd,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Category::OpdTime => "opd_time",
            Category::OpdSpecial => "opd_special",
            Category::OpdPremium => "opd_premium",
            Category::Ipd => "ipd",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::OpdTime => "OPD ในเวลา & ER",
            Category::OpdSpecial => "OPD คลินิกพิเศษ/นอกเวลา",
            Category::OpdPremium => "OPD Premium Clinic",
            Category::Ipd => "ผู้ป่วยใน (IPD)",
        }
    }

    pub fn layout(&self) -> Layout {
        match self {
            Category::Ipd => Layout::Banded,
            _ => Layout::Flat,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.id() == s.trim())
            .ok_or_else(|| AppError::UnknownSheetMapping(format!("unknown category '{}'", s)))
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Category::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Category filter for the department ranking: one category or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl FromStr for CategoryFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(CategoryFilter::All),
            other => other.parse().map(CategoryFilter::Only),
        }
    }
}

impl<'de> Deserialize<'de> for CategoryFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CategoryFilter::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A decoded sheet with its category stated explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct TaggedSheet {
    pub category: Category,
    pub rows: Sheet,
}

/// 1-based spreadsheet rows where each flat sheet keeps its grand total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TotalRowHints {
    pub opd_time: usize,
    pub opd_special: usize,
    pub opd_premium: usize,
}

impl Default for TotalRowHints {
    fn default() -> Self {
        Self {
            opd_time: 40,
            opd_special: 20,
            opd_premium: 10,
        }
    }
}

impl TotalRowHints {
    /// Hint for a flat category; banded sheets have no total row, so 0.
    pub fn for_category(&self, category: Category) -> usize {
        match category {
            Category::OpdTime => self.opd_time,
            Category::OpdSpecial => self.opd_special,
            Category::OpdPremium => self.opd_premium,
            Category::Ipd => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str() {
        assert_eq!("ipd".parse::<Category>().unwrap(), Category::Ipd);
        assert_eq!(" opd_time ".parse::<Category>().unwrap(), Category::OpdTime);
        assert!(matches!(
            "er".parse::<Category>(),
            Err(AppError::UnknownSheetMapping(_))
        ));
    }

    #[test]
    fn test_category_filter_from_str() {
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!("".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "opd_special".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(Category::OpdSpecial)
        );
        assert!("opd".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn test_tagged_sheet_deserialize() {
        let sheet: TaggedSheet =
            serde_json::from_str(r#"{"category": "opd_premium", "rows": [["a", 1, null], []]}"#)
                .unwrap();
        assert_eq!(sheet.category, Category::OpdPremium);
        assert_eq!(sheet.rows.len(), 2);

        let unknown = serde_json::from_str::<TaggedSheet>(r#"{"category": "lab", "rows": []}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn test_layouts() {
        assert_eq!(Category::Ipd.layout(), Layout::Banded);
        assert_eq!(Category::OpdSpecial.layout(), Layout::Flat);
        assert_eq!(TotalRowHints::default().for_category(Category::Ipd), 0);
    }
}
