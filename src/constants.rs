/// Speed of light in vacuum, in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0_f64;
