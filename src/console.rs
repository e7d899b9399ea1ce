//! Headless frame sink that logs progress instead of drawing

use gravity_simulation::{Frame, FrameSink};
use std::collections::VecDeque;
use std::ops::ControlFlow;

const WINDOW: usize = 100;

/// Logs a summary of the system every `every` frames
pub struct ConsoleSink {
    every: u64,
    integrate_times: VecDeque<f64>,
    present_times: VecDeque<f64>,
}

impl ConsoleSink {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            integrate_times: VecDeque::with_capacity(WINDOW),
            present_times: VecDeque::with_capacity(WINDOW),
        }
    }

    /// Mean integration time over the last frames
    pub fn average_integrate_ms(&self) -> f64 {
        average(&self.integrate_times)
    }

    /// Mean time spent presenting the last frames
    pub fn average_present_ms(&self) -> f64 {
        average(&self.present_times)
    }
}

fn record(window: &mut VecDeque<f64>, value: f64) {
    window.push_back(value);
    if window.len() > WINDOW {
        window.pop_front();
    }
}

fn average(window: &VecDeque<f64>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

impl FrameSink<2> for ConsoleSink {
    fn present(&mut self, frame: &Frame<'_, 2>) -> ControlFlow<()> {
        record(&mut self.integrate_times, frame.integrate_ms);
        // The first frame has no previous present to report
        if frame.index > 1 {
            record(&mut self.present_times, frame.present_ms);
        }

        if frame.index % self.every == 0 {
            let separation = match frame.massive {
                [a, b, ..] => a.position.distance(&b.position),
                _ => 0.0,
            };
            log::info!(
                "Frame {} (t = {:.1}): integrate {:.3} ms, present {:.3} ms, galaxy separation {:.2}, {} tracers",
                frame.index,
                frame.time,
                self.average_integrate_ms(),
                self.average_present_ms(),
                separation,
                frame.tracers.len()
            );
        }
        ControlFlow::Continue(())
    }
}
