//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements           | Connects to                      |
//! |---------------|----------------------|----------------------------------|
//! | `config_file` | ConfigPort           | JSON settings file               |
//! | `console`     | (event producer)     | stdin text commands              |
//! | `engine`      | PlaybackEngine       | player process / simulation      |
//! | `log_sink`    | EventSink            | `log` facade                     |
//! | `pipeline`    | PipelinePort         | orchestrator process / log only  |
//! | `rpi`         | FrameSource          | rppal UART                       |
//! |               | SetDutyCycle         | rppal soft PWM                   |
//! |               | (event producers)    | rppal GPIO interrupts            |
//! | `time`        | Clock                | embassy-time std driver          |

pub mod config_file;
pub mod console;
pub mod engine;
pub mod log_sink;
pub mod pipeline;
#[cfg(feature = "rpi")]
pub mod rpi;
pub mod time;
