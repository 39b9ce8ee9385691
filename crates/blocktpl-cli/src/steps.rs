use std::str::FromStr;

/// One rendering instruction from the command line, applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `set:NAME=VALUE`
    Assign { name: String, value: String },
    /// `global:NAME=VALUE`
    Global { name: String, value: String },
    /// `parse:PATH`
    Parse(String),
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("expected KIND:ARGS, got {s:?}"))?;

        match kind {
            "set" | "global" => {
                let (name, value) = rest
                    .split_once('=')
                    .ok_or_else(|| format!("expected {kind}:NAME=VALUE, got {s:?}"))?;
                if name.is_empty() {
                    return Err(format!("empty variable name in {s:?}"));
                }
                let (name, value) = (name.to_string(), value.to_string());
                Ok(if kind == "set" {
                    Step::Assign { name, value }
                } else {
                    Step::Global { name, value }
                })
            }
            "parse" if !rest.is_empty() => Ok(Step::Parse(rest.to_string())),
            "parse" => Err("parse: needs a block path".to_string()),
            other => Err(format!(
                "unknown step {other:?} (expected set, global or parse)"
            )),
        }
    }
}
