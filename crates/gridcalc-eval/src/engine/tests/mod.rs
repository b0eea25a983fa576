mod common;
mod copy_paste;
mod cycle_detection;
