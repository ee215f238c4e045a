//! Frame list parsing
//!
//! Accepts comma separated items, each a single frame (`15`), an inclusive
//! range (`1-10`) or a range with a step (`1-10x2`).

use anyhow::{bail, Context, Result};

/// Parse a frame list such as `1-10x2,15`
pub fn parse_frame_list(text: &str) -> Result<Vec<i64>> {
    let mut frames = Vec::new();
    for item in text.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        frames.extend(parse_item(item)?);
    }
    if frames.is_empty() {
        bail!("Frame list {text:?} contains no frames");
    }
    Ok(frames)
}

fn parse_item(item: &str) -> Result<Vec<i64>> {
    let (range, step) = match item.split_once('x') {
        Some((range, step)) => (
            range,
            step.parse::<i64>()
                .with_context(|| format!("Invalid step in frame item {item:?}"))?,
        ),
        None => (item, 1),
    };
    if step <= 0 {
        bail!("Frame step must be positive in {item:?}");
    }

    // A leading '-' is a sign, not a range separator
    let separator = range
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '-')
        .map(|(index, _)| index);
    let (start, end) = match separator {
        Some(index) => (parse_frame(&range[..index], item)?, parse_frame(&range[index + 1..], item)?),
        None => {
            let frame = parse_frame(range, item)?;
            (frame, frame)
        }
    };
    if end < start {
        bail!("Frame range {item:?} ends before it starts");
    }

    let step = usize::try_from(step).context("Frame step out of range")?;
    Ok((start..=end).step_by(step).collect())
}

fn parse_frame(text: &str, item: &str) -> Result<i64> {
    text.trim()
        .parse()
        .with_context(|| format!("Invalid frame {text:?} in {item:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frames_and_ranges() {
        assert_eq!(parse_frame_list("15").unwrap(), [15]);
        assert_eq!(parse_frame_list("1-4").unwrap(), [1, 2, 3, 4]);
        assert_eq!(parse_frame_list("1-10x2,15").unwrap(), [1, 3, 5, 7, 9, 15]);
    }

    #[test]
    fn test_negative_frames() {
        assert_eq!(parse_frame_list("-2-1").unwrap(), [-2, -1, 0, 1]);
        assert_eq!(parse_frame_list("-3").unwrap(), [-3]);
    }

    #[test]
    fn test_bad_lists_are_rejected() {
        assert!(parse_frame_list("").is_err());
        assert!(parse_frame_list("5-1").is_err());
        assert!(parse_frame_list("1-5x0").is_err());
        assert!(parse_frame_list("one").is_err());
    }
}
