//! DSP engine — oscillators, filter, automation and the voices built from them.
//!
//! The same voices feed the live master output and the offline renderer,
//! so a note sounds identical whichever path plays it.

pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
pub mod voice;
pub mod wav;
