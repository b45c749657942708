//! Native audio plumbing: device lookup, sample conversion, utterance
//! capture from the microphone and PCM playback to the speakers.

pub mod audio;
pub mod capture;
pub mod device;
pub mod playback;
