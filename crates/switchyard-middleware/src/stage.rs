//! The five pipeline stages.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A pipeline stage, in execution order.
///
/// `Start`, `Mount` and `In` transform the request before the controller
/// runs; `Out` and `End` transform the response after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// First request stage. Also accepted as `init`.
    Start = 0,
    /// Second request stage.
    Mount = 1,
    /// Last request stage before the controller.
    In = 2,
    /// Response stage after the controller. Skipped after a failure.
    Out = 3,
    /// Final response stage. Always runs.
    End = 4,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Mount => "mount",
            Self::In => "in",
            Self::Out => "out",
            Self::End => "end",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [Self::Start, Self::Mount, Self::In, Self::Out, Self::End]
    }

    /// The stages whose handlers transform the request.
    #[must_use]
    pub const fn request_stages() -> [Self; 3] {
        [Self::Start, Self::Mount, Self::In]
    }

    /// Returns true for `Start`, `Mount` and `In`.
    #[must_use]
    pub const fn is_request_stage(self) -> bool {
        (self as u8) <= 2
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage name that is not one of `start`, `init`, `mount`, `in`, `out`
/// or `end`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pipeline stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" | "init" => Ok(Self::Start),
            "mount" => Ok(Self::Mount),
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            "end" => Ok(Self::End),
            _ => Err(UnknownStage(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = Stage::all().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["start", "mount", "in", "out", "end"]);
        assert!(Stage::Start < Stage::End);
    }

    #[test]
    fn test_init_alias() {
        assert_eq!("init".parse::<Stage>().unwrap(), Stage::Start);
        assert_eq!("OUT".parse::<Stage>().unwrap(), Stage::Out);
        assert_eq!(
            "teardown".parse::<Stage>().unwrap_err().to_string(),
            "unknown pipeline stage 'teardown'"
        );
    }

    #[test]
    fn test_request_stages() {
        assert!(Stage::request_stages().iter().all(|s| s.is_request_stage()));
        assert!(!Stage::Out.is_request_stage());
        assert!(!Stage::End.is_request_stage());
    }
}
