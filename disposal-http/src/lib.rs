mod client;

pub use client::BackOfficeClient;
