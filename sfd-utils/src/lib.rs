//! Shared utility functions for SFD crates.

/// Text form of the compound `(timestep, stress_period)` time index.
pub mod kstpkper {
    /// Format a time index as `"(ts, sp)"`.
    pub fn format_kstpkper(timestep: u32, stress_period: u32) -> String {
        format!("({}, {})", timestep, stress_period)
    }

    /// Parse a time index in `"(ts, sp)"` form. Whitespace and the
    /// surrounding parentheses are optional.
    pub fn parse_kstpkper(s: &str) -> anyhow::Result<(u32, u32)> {
        let inner = s
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')');
        let mut parts = inner.split(',');
        let (Some(ts), Some(sp), None) = (parts.next(), parts.next(), parts.next()) else {
            anyhow::bail!("expected \"(timestep, stress_period)\", got {:?}", s);
        };
        Ok((ts.trim().parse()?, sp.trim().parse()?))
    }

}

/// Neighbourhood search windows around a grid cell.
pub mod window {
    use itertools::iproduct;

    /// Default per-axis search distances: one cell either side.
    pub const DEFAULT_SEARCH_DISTANCE: [i64; 3] = [-1, 0, 1];

    /// Cartesian product of `distances` with itself, as `(di, dj)` offsets.
    ///
    /// `[-1, 0, 1]` yields the 3x3 neighbourhood including `(0, 0)`, ordered
    /// row offset first.
    pub fn search_offsets(distances: &[i64]) -> Vec<(i64, i64)> {
        iproduct!(distances.iter().copied(), distances.iter().copied()).collect()
    }

    /// The default 3x3 window.
    pub fn default_offsets() -> Vec<(i64, i64)> {
        search_offsets(&DEFAULT_SEARCH_DISTANCE)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_default_window() {
            let offsets = default_offsets();
            assert_eq!(offsets.len(), 9);
            assert_eq!(offsets[0], (-1, -1));
            assert_eq!(offsets[4], (0, 0));
            assert_eq!(offsets[8], (1, 1));
        }

        #[test]
        fn test_single_distance() {
            assert_eq!(search_offsets(&[0]), vec![(0, 0)]);
        }
    }
}

/// Numbers written by Fortran list output.
pub mod fortran {
    /// Parse a real written by Fortran formatted output.
    ///
    /// Accepts plain Rust-parsable numbers, `D` exponents (`1.0D+02`) and the
    /// three-digit exponent form where the `E` is dropped (`0.1234-100`).
    pub fn parse_fortran_f64(s: &str) -> Option<f64> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(v) = s.parse::<f64>() {
            return Some(v);
        }
        let replaced = s.replace(['D', 'd'], "E");
        if let Ok(v) = replaced.parse::<f64>() {
            return Some(v);
        }
        // Sign of a missing-E exponent: not the leading sign, preceded by a digit.
        let bytes = replaced.as_bytes();
        let pos = (1..bytes.len())
            .rev()
            .find(|&i| (bytes[i] == b'+' || bytes[i] == b'-') && bytes[i - 1].is_ascii_digit())?;
        let patched = format!("{}E{}", &replaced[..pos], &replaced[pos..]);
        patched.parse::<f64>().ok()
    }

}
