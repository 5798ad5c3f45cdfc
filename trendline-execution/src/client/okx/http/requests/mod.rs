pub mod get_candles;
pub mod get_positions;
pub mod place_order;
pub mod set_leverage;
pub mod set_position_mode;
