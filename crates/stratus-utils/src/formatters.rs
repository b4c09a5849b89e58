use std::time::Duration;

/// Trait for formatting different types of data
pub trait Formatter<T> {
    fn format(&self, input: T) -> String;
}

/// Formats poll durations ("850ms", "42s", "3m 5s", "1h 2m")
pub struct ElapsedFormatter;

impl Formatter<Duration> for ElapsedFormatter {
    fn format(&self, elapsed: Duration) -> String {
        let seconds = elapsed.as_secs();
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        let secs = seconds % 60;

        if hours > 0 {
            format!("{}h {}m", hours, mins)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else if seconds > 0 {
            format!("{}s", secs)
        } else {
            format!("{}ms", elapsed.as_millis())
        }
    }
}

/// Formats optional prices for tables
pub struct PriceFormatter;

impl Formatter<Option<f64>> for PriceFormatter {
    fn format(&self, price: Option<f64>) -> String {
        match price {
            Some(p) if p.is_finite() => format!("${:.3}", p),
            _ => "N/A".to_string(),
        }
    }
}

// Convenience functions
pub fn format_elapsed(elapsed: Duration) -> String {
    ElapsedFormatter.format(elapsed)
}

pub fn format_price(price: Option<f64>) -> String {
    PriceFormatter.format(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_formatting() {
        let formatter = ElapsedFormatter;

        assert_eq!(formatter.format(Duration::from_millis(850)), "850ms");
        assert_eq!(formatter.format(Duration::from_secs(42)), "42s");
        assert_eq!(formatter.format(Duration::from_secs(185)), "3m 5s");
        assert_eq!(formatter.format(Duration::from_secs(3720)), "1h 2m");
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(format_price(Some(0.125)), "$0.125");
        assert_eq!(format_price(None), "N/A");
        assert_eq!(format_price(Some(f64::INFINITY)), "N/A");
    }
}
