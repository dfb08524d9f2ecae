mod bridge_tests {
    pub mod helpers;

    mod channel;
    mod context;
    mod request;
}
