mod controller;
mod phase;
