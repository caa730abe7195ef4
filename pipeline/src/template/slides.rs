//! Slide-count distribution derived from session duration.

use serde::{Deserialize, Serialize};

/// Smallest deck for which opening, core and closing can each hold a slide.
const MIN_SPLITTABLE_SLIDES: u32 = 3;

/// Constants controlling how a session is split into slides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlideRules {
    pub minutes_per_slide: u32,
    pub minimum_slides: u32,
    pub opening_fraction: f64,
    pub closing_fraction: f64
}

impl Default for SlideRules {
    fn default() -> Self {
        Self {
            minutes_per_slide: 5,
            minimum_slides: 15,
            opening_fraction: 0.10,
            closing_fraction: 0.20
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideDistribution {
    pub total: u32,
    pub opening: u32,
    pub core: u32,
    pub closing: u32
}

impl SlideRules {
    /// Splits a session of `duration` minutes into opening, core and closing
    /// slides.
    ///
    /// Every section gets at least one slide and the sections always add up
    /// to `total`. When the fractions leave no room for core content, the
    /// larger of opening and closing gives up slides first.
    pub fn distribute(&self, duration: u32) -> SlideDistribution {
        let per_slide = self.minutes_per_slide.max(1);
        let minimum = self.minimum_slides.max(MIN_SPLITTABLE_SLIDES);

        let by_duration = (f64::from(duration) / f64::from(per_slide)).round() as u32;
        let total = by_duration.max(minimum);

        let mut opening = section_size(total, self.opening_fraction);
        let mut closing = section_size(total, self.closing_fraction);

        while opening + closing >= total {
            if closing > opening {
                closing -= 1;
            } else if opening > 1 {
                opening -= 1;
            } else {
                break;
            }
        }

        SlideDistribution {
            total,
            opening,
            core: total - opening - closing,
            closing
        }
    }
}

fn section_size(total: u32, fraction: f64) -> u32 {
    let raw = (f64::from(total) * fraction.max(0.0)).round();
    (raw as u32).clamp(1, total)
}
