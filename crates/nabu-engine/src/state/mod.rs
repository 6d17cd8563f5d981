//! Small state helpers driven from a node's update.

mod keyed_switch;

pub use keyed_switch::KeyedSwitch;
