mod bus;
mod event;
