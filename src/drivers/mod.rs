//! Low-level bus and device drivers.
//!
//! | Driver     | Role                                                   |
//! |------------|--------------------------------------------------------|
//! | `onewire`  | Bit-banged 1-Wire master over an open-drain GPIO + CRC8 |
//! | `ds18b20`  | MATCH ROM / CONVERT T / READ SCRATCHPAD command layer  |

pub mod ds18b20;
pub mod onewire;
