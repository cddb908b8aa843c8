use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::error::TrainError;

/// Which update rule the trainer drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Kingma & Ba (2015)
    #[default]
    Adam,
    Sgd,
    RmsProp,
    AdaGrad,
}

impl OptimizerKind {
    pub const ALL: [OptimizerKind; 4] = [
        OptimizerKind::Adam,
        OptimizerKind::Sgd,
        OptimizerKind::RmsProp,
        OptimizerKind::AdaGrad,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptimizerKind::Adam    => "adam",
            OptimizerKind::Sgd     => "sgd",
            OptimizerKind::RmsProp => "rmsprop",
            OptimizerKind::AdaGrad => "adagrad",
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizerKind {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                TrainError::config(format!(
                    "unknown optimizer '{s}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_known_names() {
        assert_eq!("adam".parse::<OptimizerKind>().unwrap(), OptimizerKind::Adam);
        assert_eq!("SGD".parse::<OptimizerKind>().unwrap(), OptimizerKind::Sgd);
        assert_eq!(" rmsprop ".parse::<OptimizerKind>().unwrap(), OptimizerKind::RmsProp);
        assert_eq!("adagrad".parse::<OptimizerKind>().unwrap(), OptimizerKind::AdaGrad);
    }

    #[test]
    fn test_unknown_name_is_configuration_error() {
        let err = "lbfgs".parse::<OptimizerKind>().unwrap_err();
        assert!(matches!(err, TrainError::Configuration(_)));
        assert!(err.to_string().contains("lbfgs"));
    }

    #[test]
    fn test_display_round_trips() {
        for kind in OptimizerKind::ALL {
            assert_eq!(kind.to_string().parse::<OptimizerKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&OptimizerKind::RmsProp).unwrap();
        assert_eq!(json, "\"rmsprop\"");
    }
}
