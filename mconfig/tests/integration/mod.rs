mod common;
mod lifecycle;
mod pipeline;
mod processor;
mod provider;
