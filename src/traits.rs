/// All commands need to have this trait which gives the address of the command
/// which needs to be send via SPI as the first byte of a transaction
pub(crate) trait Command: Copy {
    fn address(self) -> u8;
}
