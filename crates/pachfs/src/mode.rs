// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use std::str::FromStr;

/// A parsed `open()`-style mode string such as `"rb"`, `"wb"` or `"r+b"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    base: Base,
    plus: bool,
    text: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Base {
    Read,
    Write,
    Append,
    Exclusive,
}

impl Mode {
    pub fn parse(mode: &str) -> Result<Self> {
        let invalid = || Error::InvalidMode(mode.to_string());
        if !mode.starts_with(['r', 'w', 'a', 'x']) {
            return Err(invalid());
        }

        let mut base = None;
        let mut plus = false;
        let mut binary = false;
        let mut text = false;

        for c in mode.chars() {
            let next = match c {
                'r' => Base::Read,
                'w' => Base::Write,
                'a' => Base::Append,
                'x' => Base::Exclusive,
                '+' if !plus => {
                    plus = true;
                    continue;
                }
                'b' if !binary => {
                    binary = true;
                    continue;
                }
                't' if !text => {
                    text = true;
                    continue;
                }
                _ => return Err(invalid()),
            };
            if base.replace(next).is_some() {
                return Err(invalid());
            }
        }

        if binary && text {
            return Err(invalid());
        }
        let base = base.ok_or_else(invalid)?;
        Ok(Mode { base, plus, text })
    }

    /// Reject text modes; handles only move bytes.
    pub fn validate_bin(&self) -> Result<()> {
        if self.text {
            return Err(Error::InvalidMode(self.to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn reading(&self) -> bool {
        self.base == Base::Read || self.plus
    }

    #[must_use]
    pub fn writing(&self) -> bool {
        self.base != Base::Read || self.plus
    }

    /// The open may bring a new file into existence.
    #[must_use]
    pub fn create(&self) -> bool {
        matches!(self.base, Base::Write | Base::Append | Base::Exclusive)
    }

    #[must_use]
    pub fn truncate(&self) -> bool {
        matches!(self.base, Base::Write | Base::Exclusive)
    }

    #[must_use]
    pub fn appending(&self) -> bool {
        self.base == Base::Append
    }

    #[must_use]
    pub fn exclusive(&self) -> bool {
        self.base == Base::Exclusive
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Mode::parse(s)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let base = match self.base {
            Base::Read => "r",
            Base::Write => "w",
            Base::Append => "a",
            Base::Exclusive => "x",
        };
        let plus = if self.plus { "+" } else { "" };
        let kind = if self.text { "t" } else { "b" };
        write!(f, "{base}{plus}{kind}")
    }
}
