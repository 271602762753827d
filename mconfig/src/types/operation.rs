use std::fmt;

use crate::bail;
use crate::error::{ErrorKind, MconfigResult};

/// Kind of row change carried by a CDC message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    /// Row emitted by an initial snapshot.
    Read,
    Update,
    Delete,
}

impl Operation {
    /// Decodes the single letter operation code of a CDC envelope.
    pub fn from_code(code: &str) -> MconfigResult<Operation> {
        match code {
            "c" => Ok(Operation::Create),
            "r" => Ok(Operation::Read),
            "u" => Ok(Operation::Update),
            "d" => Ok(Operation::Delete),
            other => bail!(
                ErrorKind::UnsupportedOperation,
                "Unsupported CDC operation",
                format!("Unrecognized operation code '{other}'")
            ),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Operation::Create => "c",
            Operation::Read => "r",
            Operation::Update => "u",
            Operation::Delete => "d",
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };

        f.write_str(name)
    }
}
