use std::fmt;

use serde::Serialize;

use crate::result_set::ResultSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }

    pub fn is_pass(self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PASS iff every result set is empty.
pub fn aggregate<'a, I>(result_sets: I) -> Verdict
where
    I: IntoIterator<Item = &'a ResultSet>,
{
    if result_sets.into_iter().all(ResultSet::is_empty) {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}
