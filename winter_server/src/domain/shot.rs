// Parsing and resolving `shoot <x> <y>` commands.

use super::target::Target;
use thiserror::Error;

/// Why a gameplay command did not hit. The display text is sent to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShotError {
    #[error("wrong shoot command")]
    Malformed,
    #[error("failed to convert coordinate to int")]
    BadCoordinate,
    #[error("shoot missed the target")]
    Missed,
}

/// Parses `shoot <x> <y>`; the keyword is case-insensitive and coordinates
/// are unsigned base-10 digits.
pub fn parse_shot(line: &str) -> Result<(u32, u32), ShotError> {
    let mut args = line.split_ascii_whitespace();
    let (Some(keyword), Some(x), Some(y), None) = (args.next(), args.next(), args.next(), args.next())
    else {
        return Err(ShotError::Malformed);
    };
    if !keyword.eq_ignore_ascii_case("shoot") {
        return Err(ShotError::Malformed);
    }

    Ok((coordinate(x)?, coordinate(y)?))
}

/// Parses the command and checks it against the target's current position.
pub fn resolve_shot(target: &Target, line: &str) -> Result<(), ShotError> {
    let (x, y) = parse_shot(line)?;
    if target.is_hit(x, y) {
        Ok(())
    } else {
        Err(ShotError::Missed)
    }
}

fn coordinate(token: &str) -> Result<u32, ShotError> {
    token.bytes().try_fold(0u32, |acc, byte| {
        if !byte.is_ascii_digit() {
            return Err(ShotError::BadCoordinate);
        }
        acc.checked_mul(10)
            .and_then(|acc| acc.checked_add(u32::from(byte - b'0')))
            .ok_or(ShotError::BadCoordinate)
    })
}
