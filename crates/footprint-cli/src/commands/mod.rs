pub mod decode;
pub mod encode;
pub mod hash;
pub mod inspect;
