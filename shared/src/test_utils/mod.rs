pub mod mock_transport;
pub mod test_logging;
