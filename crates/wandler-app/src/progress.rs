// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Terminal progress bar fed by the converter's percent callback.

use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{msg} [{bar:40}] {pos:>3}%";

pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// A 0..=100 bar, or a hidden one when `hidden` is set.
    pub fn new(message: String, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(100);
            if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                bar.set_style(style.progress_chars("##-"));
            }
            bar
        };
        bar.set_message(message);
        Self { bar }
    }

    /// Move the bar to `percent`, clamped to 0..=100.
    pub fn update(&self, percent: f64) {
        self.bar.set_position(percent.clamp(0.0, 100.0).round() as u64);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
