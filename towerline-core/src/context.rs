//! Access to simulator properties and outputs.

use crate::comm::{Frequency, Transmission};

/// Number of comm radios consulted for audibility.
pub const COMM_RADIOS: usize = 2;

/// The simulator surface visible to controllers.
pub trait SimContext {
    /// Current simulated time in epoch seconds.
    fn now(&self) -> i64;

    /// `/sim/sound/atc/enabled`
    fn atc_sound_enabled(&self) -> bool;

    /// `/instrumentation/comm[radio]/frequencies/selected-mhz`
    fn comm_frequency_mhz(&self, radio: usize) -> Option<f64>;

    /// `/sim/radio/use-itm-attenuation`
    fn itm_attenuation(&self) -> bool;

    /// `/sim/multiplay/callsign`
    fn user_callsign(&self) -> String;

    /// `/sim/atc/transmission-num`, the message selected by the user.
    ///
    /// `-1` means nothing is selected, `0` accepts the pending message
    /// and positive values select an alternative message.
    fn transmission_num(&self) -> i32;

    /// Resets `/sim/atc/transmission-num` to `-1`.
    fn reset_transmission_num(&mut self);

    /// Writes a line to `/sim/messages/atc`.
    fn publish_atc_message(&mut self, text: &str);

    /// Routes a transmission through the radio propagation model.
    fn receive_atc(&mut self, transmission: &Transmission);

    /// Whether any comm radio is tuned to `frequency`.
    fn is_tuned_to(&self, frequency: Frequency) -> bool {
        (0..COMM_RADIOS).any(|radio| {
            self.comm_frequency_mhz(radio).is_some_and(|mhz| Frequency::from_mhz(mhz) == frequency)
        })
    }
}

/// Something a controller emitted to the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Text published to `/sim/messages/atc`.
    Published(String),
    /// A transmission routed through `receive_atc`.
    Received(Transmission),
}

/// A [`SimContext`] backed by plain fields.
///
/// Outputs are buffered in [`outputs`](Self::outputs) until drained.
#[derive(Debug, Clone)]
pub struct MemoryContext {
    pub now:               i64,
    pub atc_sound_enabled: bool,
    pub comm_mhz:          [Option<f64>; COMM_RADIOS],
    pub itm_attenuation:   bool,
    pub user_callsign:     String,
    pub transmission_num:  i32,
    pub outputs:           Vec<Output>,
}

impl Default for MemoryContext {
    fn default() -> Self {
        Self {
            now:               0,
            atc_sound_enabled: false,
            comm_mhz:          [None; COMM_RADIOS],
            itm_attenuation:   false,
            user_callsign:     String::new(),
            transmission_num:  -1,
            outputs:           Vec::new(),
        }
    }
}

impl MemoryContext {
    /// Takes all buffered outputs.
    pub fn drain_outputs(&mut self) -> Vec<Output> { std::mem::take(&mut self.outputs) }

    /// Texts of all buffered outputs, regardless of the output path.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|output| match output {
            Output::Published(text) => text.as_str(),
            Output::Received(transmission) => transmission.text.as_str(),
        })
    }
}

impl SimContext for MemoryContext {
    fn now(&self) -> i64 { self.now }

    fn atc_sound_enabled(&self) -> bool { self.atc_sound_enabled }

    fn comm_frequency_mhz(&self, radio: usize) -> Option<f64> {
        self.comm_mhz.get(radio).copied().flatten()
    }

    fn itm_attenuation(&self) -> bool { self.itm_attenuation }

    fn user_callsign(&self) -> String { self.user_callsign.clone() }

    fn transmission_num(&self) -> i32 { self.transmission_num }

    fn reset_transmission_num(&mut self) { self.transmission_num = -1; }

    fn publish_atc_message(&mut self, text: &str) {
        self.outputs.push(Output::Published(text.to_owned()));
    }

    fn receive_atc(&mut self, transmission: &Transmission) {
        self.outputs.push(Output::Received(transmission.clone()));
    }
}
