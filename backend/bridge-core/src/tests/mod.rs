mod fanout;
mod notification;
