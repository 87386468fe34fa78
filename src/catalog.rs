use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisLabel {
    Healthy,
    BacterialSpot,
    EarlyBlight,
    LateBlight,
    LeafMold,
}

/// Display text for one label. Lives for the whole process.
#[derive(Debug, PartialEq, Eq)]
pub struct DiagnosisInfo {
    pub status: &'static str,
    pub cause: &'static str,
    pub solution: &'static str,
}

impl DiagnosisLabel {
    /// Catalog order, which is also the built-in class-index order.
    pub const ALL: [DiagnosisLabel; 5] = [
        DiagnosisLabel::Healthy,
        DiagnosisLabel::BacterialSpot,
        DiagnosisLabel::EarlyBlight,
        DiagnosisLabel::LateBlight,
        DiagnosisLabel::LeafMold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosisLabel::Healthy => "healthy",
            DiagnosisLabel::BacterialSpot => "bacterial_spot",
            DiagnosisLabel::EarlyBlight => "early_blight",
            DiagnosisLabel::LateBlight => "late_blight",
            DiagnosisLabel::LeafMold => "leaf_mold",
        }
    }

    pub fn info(self) -> &'static DiagnosisInfo {
        lookup(self)
    }
}

static HEALTHY: DiagnosisInfo = DiagnosisInfo {
    status: "健康",
    cause: "無病害",
    solution: "維持良好環境即可。",
};
static BACTERIAL_SPOT: DiagnosisInfo = DiagnosisInfo {
    status: "細菌性斑點病",
    cause: "潮濕環境感染。",
    solution: "移除病葉，用銅劑處理。",
};
static EARLY_BLIGHT: DiagnosisInfo = DiagnosisInfo {
    status: "早疫病",
    cause: "老葉感染 Alternaria。",
    solution: "清除病葉，噴藥。",
};
static LATE_BLIGHT: DiagnosisInfo = DiagnosisInfo {
    status: "晚疫病",
    cause: "疫黴菌感染。",
    solution: "噴甲霜靈，移除感染區。",
};
static LEAF_MOLD: DiagnosisInfo = DiagnosisInfo {
    status: "葉黴病",
    cause: "高濕黴菌感染。",
    solution: "通風、殺菌劑。",
};

pub fn lookup(label: DiagnosisLabel) -> &'static DiagnosisInfo {
    match label {
        DiagnosisLabel::Healthy => &HEALTHY,
        DiagnosisLabel::BacterialSpot => &BACTERIAL_SPOT,
        DiagnosisLabel::EarlyBlight => &EARLY_BLIGHT,
        DiagnosisLabel::LateBlight => &LATE_BLIGHT,
        DiagnosisLabel::LeafMold => &LEAF_MOLD,
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown diagnosis label '{0}'")]
    UnknownLabel(String),
    #[error("label '{0}' appears more than once in the class list")]
    DuplicateLabel(DiagnosisLabel),
    #[error("class list names {found} labels, expected {expected}")]
    WrongCount { expected: usize, found: usize },
}

impl FromStr for DiagnosisLabel {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiagnosisLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownLabel(s.to_string()))
    }
}

impl fmt::Display for DiagnosisLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps the model's output indices to labels. Must match the order the model
/// was trained with, so it ships as a file next to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassOrder {
    labels: Vec<DiagnosisLabel>,
}

impl Default for ClassOrder {
    fn default() -> Self {
        ClassOrder {
            labels: DiagnosisLabel::ALL.to_vec(),
        }
    }
}

impl ClassOrder {
    /// One identifier per line; blank lines are ignored. Every label must
    /// appear exactly once.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let mut labels = Vec::with_capacity(DiagnosisLabel::ALL.len());

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let label: DiagnosisLabel = line.parse()?;
            if labels.contains(&label) {
                return Err(CatalogError::DuplicateLabel(label));
            }
            labels.push(label);
        }

        if labels.len() != DiagnosisLabel::ALL.len() {
            return Err(CatalogError::WrongCount {
                expected: DiagnosisLabel::ALL.len(),
                found: labels.len(),
            });
        }

        Ok(ClassOrder { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label_at(&self, index: usize) -> Option<DiagnosisLabel> {
        self.labels.get(index).copied()
    }
}
