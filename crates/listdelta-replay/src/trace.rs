#![forbid(unsafe_code)]

//! JSON Lines change traces.
//!
//! One record per line, tagged by `"kind"`:
//!
//! ```text
//! {"kind":"begin"}
//! {"kind":"item_updated","index":{"section":0,"item":2}}
//! {"kind":"item_moved","from":{"section":0,"item":5},"to":{"section":1,"item":0}}
//! {"kind":"end"}
//! {"kind":"complete","finished":true}
//! ```
//!
//! Every mutation kind of [`ChangeEvent`] is accepted as-is. Blank lines and
//! lines starting with `#` are skipped.

use listdelta_core::ChangeEvent;
use serde::Deserialize;
use serde_json::Value;

/// One line of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRecord {
    Begin,
    End,
    /// The surface's transaction settled.
    Complete { finished: bool },
    Event(ChangeEvent),
}

#[derive(Deserialize)]
struct CompleteFields {
    #[serde(default = "default_finished")]
    finished: bool,
}

fn default_finished() -> bool {
    true
}

impl TraceRecord {
    /// Parse one trace line. Returns `Ok(None)` for blank and comment lines.
    pub fn parse_line(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(line)?;
        let record = match value.get("kind").and_then(Value::as_str) {
            Some("begin") => Self::Begin,
            Some("end") => Self::End,
            Some("complete") => {
                let fields: CompleteFields = serde_json::from_value(value)?;
                Self::Complete {
                    finished: fields.finished,
                }
            }
            _ => Self::Event(serde_json::from_value(value)?),
        };
        Ok(Some(record))
    }

    /// Stable name for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::End => "end",
            Self::Complete { .. } => "complete",
            Self::Event(event) => event.kind(),
        }
    }
}
