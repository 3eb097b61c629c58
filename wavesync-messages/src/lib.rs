mod command;
mod event;
mod state;
mod units;
mod wire;

pub use command::Command;
pub use event::{Event, Notice, RenderFrame, SchedulerStats};
pub use state::{ConnectionState, SpectrumFrame, SyncMode, ViewState};
pub use units::{Decibels, Hertz};
pub use wire::{
    AdmissionRequest, AdmissionResponse, ClientCommand, ConfigEcho, ServerError, ServerMessage,
    SpectrumPayload,
};
