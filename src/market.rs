use std::fmt;
use std::str::FromStr;

use crate::error::ReportError;

/// One of the three sales metrics, each sourced from its own file pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Volume,
    Revenue,
    Transactions,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Volume, Metric::Revenue, Metric::Transactions];

    /// Positional index of the metric value in a sales record.
    pub fn value_field(self) -> usize {
        match self {
            Metric::Volume | Metric::Revenue => 13,
            Metric::Transactions => 14,
        }
    }

    /// Lower-case substring that identifies the metric's file in a part folder.
    pub fn file_pattern(self) -> &'static str {
        match self {
            Metric::Volume => "volume_sales",
            Metric::Revenue => "revenue_sales",
            Metric::Transactions => "stddisc_transaction",
        }
    }

    /// Column name in a market report.
    pub fn column_name(self) -> &'static str {
        match self {
            Metric::Volume => "volume",
            Metric::Revenue => "revenue",
            Metric::Transactions => "transactions",
        }
    }

    /// Sheet and header label in the MX workbook.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Volume => "Volume",
            Metric::Revenue => "Revenue",
            Metric::Transactions => "Transactions",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// How the per-part tables of one metric are folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineRule {
    /// Concatenate every part and re-group by key.
    Union,
    /// Exactly two parts are additive contributions: outer join, zero fill, add.
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Arg,
    Ec,
    Htc,
    Pe,
    Mx,
}

impl Market {
    pub const ALL: [Market; 5] = [Market::Arg, Market::Ec, Market::Htc, Market::Pe, Market::Mx];

    pub fn code(self) -> &'static str {
        match self {
            Market::Arg => "ARG",
            Market::Ec => "EC",
            Market::Htc => "HTC",
            Market::Pe => "PE",
            Market::Mx => "MX",
        }
    }

    /// Part folders delivered for the market in a regular run.
    pub fn parts(self) -> Vec<String> {
        let count = match self {
            Market::Arg | Market::Ec | Market::Htc => 1,
            Market::Pe => 2,
            Market::Mx => MxMode::Completo.part_count(),
        };
        part_names(count)
    }

    pub fn combine_rule(self) -> CombineRule {
        match self {
            Market::Pe => CombineRule::Additive,
            _ => CombineRule::Union,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Market {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Market::ALL
            .into_iter()
            .find(|m| m.code() == wanted)
            .ok_or_else(|| ReportError::UnknownMarket(s.to_string()))
    }
}

/// MX delivery mode: the full month close or the pre-close with three parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MxMode {
    #[default]
    Completo,
    Precierre,
}

impl MxMode {
    pub fn part_count(self) -> usize {
        match self {
            MxMode::Completo => 4,
            MxMode::Precierre => 3,
        }
    }

    pub fn parts(self) -> Vec<String> {
        part_names(self.part_count())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MxMode::Completo => "completo",
            MxMode::Precierre => "precierre",
        }
    }
}

fn part_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("Part{i}")).collect()
}
