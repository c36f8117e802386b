//! Aggregate weather statistics for a generated route

use std::collections::HashMap;

use crate::models::ForecastSample;

/// Weather descriptions seen along a route, in encounter order
#[derive(Debug, Default, Clone)]
pub struct DescriptionTally {
    descriptions: Vec<String>,
}

impl DescriptionTally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the description of a matched sample; points without weather
    /// data do not count
    pub fn record(&mut self, sample: Option<&ForecastSample>) {
        if let Some(sample) = sample {
            let description = sample.description.trim();
            if !description.is_empty() {
                self.descriptions.push(description.to_string());
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    /// Most frequent description, title-cased.
    ///
    /// On a tie the description encountered first wins.
    #[must_use]
    pub fn dominant(&self) -> Option<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for description in &self.descriptions {
            *counts.entry(description.as_str()).or_default() += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for description in &self.descriptions {
            let count = counts[description.as_str()];
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((description, count));
            }
        }

        best.map(|(description, _)| title_case(description))
    }
}

/// Upper-case the first character of every word
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && !in_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        in_word = is_word;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn sample(description: &str) -> ForecastSample {
        ForecastSample {
            timestamp: Utc::now(),
            temperature: 12.0,
            humidity: 60,
            wind_speed: 3.0,
            wind_direction: 180,
            description: description.to_string(),
        }
    }

    fn tally(descriptions: &[&str]) -> DescriptionTally {
        let mut tally = DescriptionTally::new();
        for description in descriptions {
            tally.record(Some(&sample(description)));
        }
        tally
    }

    #[test]
    fn test_most_frequent_wins() {
        let tally = tally(&["clear sky", "light rain", "light rain", "clear sky", "light rain"]);
        assert_eq!(tally.dominant().as_deref(), Some("Light Rain"));
    }

    #[test]
    fn test_tie_goes_to_first_encountered() {
        let tally = tally(&["overcast clouds", "clear sky", "clear sky", "overcast clouds"]);
        assert_eq!(tally.dominant().as_deref(), Some("Overcast Clouds"));
    }

    #[test]
    fn test_missing_weather_is_not_counted() {
        let mut tally = DescriptionTally::new();
        tally.record(None);
        tally.record(Some(&sample("  ")));
        assert!(tally.is_empty());
        assert_eq!(tally.dominant(), None);
    }

    #[rstest]
    #[case("light rain", "Light Rain")]
    #[case("thunderstorm with heavy drizzle", "Thunderstorm With Heavy Drizzle")]
    #[case("smoke/haze", "Smoke/Haze")]
    #[case("Clear", "Clear")]
    #[case("", "")]
    fn test_title_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(title_case(input), expected);
    }
}
