pub mod abandoned_sweep;
