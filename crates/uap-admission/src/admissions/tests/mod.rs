mod common;
mod merit;
mod payment;
