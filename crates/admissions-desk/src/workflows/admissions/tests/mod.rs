mod common;
mod follow_ups;
