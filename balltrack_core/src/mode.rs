//! IDLE / TEST / RUN / HOLD state machine.
//!
//! [`transition`] is the only place modes change. It is pure: the caller
//! applies the returned effects in order.

use crate::config::ModeTiming;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Test,
    Run {
        started_ms: u64,
    },
    Hold {
        run_started_ms: u64,
        hold_started_ms: u64,
    },
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Test => "TEST",
            Self::Run { .. } => "RUN",
            Self::Hold { .. } => "HOLD",
        }
    }

    fn same_kind(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

impl core::fmt::Display for Mode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Test,
    Start,
    /// `STOP` or `B`.
    Stop,
    /// One sampling period elapsed.
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Clear the controller integral and derivative history.
    ResetController,
    /// Move the servo to `zero + offset_deg`.
    Drive { offset_deg: i32 },
    /// Move the servo to `zero`.
    Park,
    /// Clear the HOLD error accumulator.
    ResetMae,
    /// Emit `MAE=...` from the accumulator.
    EmitResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: Mode,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(mode: Mode) -> Self {
        Self {
            next: mode,
            effects: Vec::new(),
        }
    }

    pub fn changed_from(&self, prev: &Mode) -> bool {
        !self.next.same_kind(prev)
    }
}

pub fn transition(mode: Mode, event: Event, now_ms: u64, timing: &ModeTiming) -> Transition {
    match event {
        Event::Stop => Transition {
            next: Mode::Idle,
            effects: vec![Effect::ResetController, Effect::Park],
        },
        Event::Test => Transition {
            next: Mode::Test,
            effects: vec![Effect::ResetController],
        },
        Event::Start => Transition {
            next: Mode::Run { started_ms: now_ms },
            effects: vec![
                Effect::ResetController,
                Effect::Drive {
                    offset_deg: timing.start_nudge_deg,
                },
            ],
        },
        Event::Tick => tick(mode, now_ms, timing),
    }
}

fn tick(mode: Mode, now_ms: u64, timing: &ModeTiming) -> Transition {
    match mode {
        Mode::Idle | Mode::Test => Transition::stay(mode),
        Mode::Run { started_ms } => {
            let ran = now_ms.saturating_sub(started_ms);
            let mut out = Transition::stay(mode);
            if ran >= timing.hold_after_ms {
                out.next = Mode::Hold {
                    run_started_ms: started_ms,
                    hold_started_ms: now_ms,
                };
                out.effects.extend([Effect::ResetController, Effect::ResetMae]);
            }
            // Checked after HOLD on the same elapsed value: reaching both in
            // one pass enters HOLD and immediately ends with zero samples.
            if ran >= timing.run_cutoff_ms {
                out.next = Mode::Idle;
                if out.effects.is_empty() {
                    out.effects.push(Effect::ResetController);
                }
                out.effects.extend([Effect::EmitResult, Effect::Park]);
            }
            out
        }
        Mode::Hold {
            run_started_ms,
            hold_started_ms,
        } => {
            let held = now_ms.saturating_sub(hold_started_ms);
            let ran = now_ms.saturating_sub(run_started_ms);
            if held >= timing.hold_window_ms || ran >= timing.run_cutoff_ms {
                Transition {
                    next: Mode::Idle,
                    effects: vec![Effect::ResetController, Effect::EmitResult, Effect::Park],
                }
            } else {
                Transition::stay(mode)
            }
        }
    }
}
