use device_descriptor::*;

/// Low byte of `FgOpStatus` once the chip holds a valid parameter set.
pub const DISABLE_RE_INIT: u8 = 0x10;

/// Control register value of a chip that came out of reset on its own.
pub const CNTL_RESET_SENTINEL: u16 = 0x2008;

/// Written to [`SoftReset`] to restart the gauge.
pub const SOFT_RESET_CODE: u16 = 0x0008;

pub const PARAM_UNLOCK_CODE: u8 = 0x37;
pub const PARAM_LOCK_CODE: u8 = 0x00;

/// Index of the last entry in each OCV table, as encoded in `ParamCtrl`.
pub const TABLE_LEN: u8 = 0x10;
pub const TABLE_ENTRIES: usize = TABLE_LEN as usize + 1;
pub const TABLE_COUNT: usize = 3;

const TABLE_START: u8 = 0xA0;
const TABLE_STRIDE: u8 = 0x10;

/// Register address of entry `entry` in OCV table `table`.
///
/// ```rust
/// # use sm5703::descriptors::table_entry_address;
/// assert_eq!(table_entry_address(0, 0), 0xA0);
/// assert_eq!(table_entry_address(1, 3), 0xB3);
/// assert_eq!(table_entry_address(2, 16), 0xD0);
/// ```
pub const fn table_entry_address(table: usize, entry: usize) -> u8 {
    TABLE_START + (table as u8) * TABLE_STRIDE + entry as u8
}

device! {
    DeviceId(u16, addr = 0x00) {
        revision(pos = 0, width = 8): u8
    }
    Cntl(u16, addr = 0x01, default = 0x0000) {
        mix_mode(pos = 15, width = 1): Enable {
            Enabled = 1,
            Disabled = 0
        },
        temp_measure(pos = 14, width = 1): Enable,
        topoff_soc(pos = 13, width = 1): Enable,
        rs_manual(pos = 11, width = 1): Enable,
        manual_ocv(pos = 10, width = 1): Enable,
        mode_nenq4(pos = 9, width = 1): Enable
    }
    IntFg(u16, addr = 0x02) {
        low_soc(pos = 3, width = 1): Alert {
            Alert = 1,
            NoAlert = 0
        },
        high_temp(pos = 2, width = 1): Alert,
        low_temp(pos = 1, width = 1): Alert,
        low_voltage(pos = 0, width = 1): Alert
    }
    IntFgMask(u16, addr = 0x03, default = 0x0000) {
        low_soc(pos = 3, width = 1): Enable,
        high_temp(pos = 2, width = 1): Enable,
        low_temp(pos = 1, width = 1): Enable,
        low_voltage(pos = 0, width = 1): Enable
    }
    Status(u16, addr = 0x04) {}
    Soc(u16, addr = 0x05) {}
    Ocv(u16, addr = 0x06) {}
    Voltage(u16, addr = 0x07) {}
    Current(u16, addr = 0x08) {}
    Temperature(u16, addr = 0x09) {}
    VAlarm(u16, addr = 0x0C, default = 0x0000) {
        threshold(pos = 0, width = 16): u16
    }
    TAlarm(u16, addr = 0x0D, default = 0x0000) {
        threshold(pos = 0, width = 16): u16
    }
    SocAlarm(u16, addr = 0x0E, default = 0x0000) {
        threshold(pos = 0, width = 16): u16
    }
    FgOpStatus(u16, addr = 0x10) {
        state(pos = 0, width = 8): u8
    }
    TopOffSoc(u16, addr = 0x12, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    ParamCtrl(u16, addr = 0x13, default = 0x0000) {
        code(pos = 8, width = 8): u8,
        table_len(pos = 0, width = 8): u8
    }
    VitPeriod(u16, addr = 0x1A, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    MixRate(u16, addr = 0x1B, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    MixInitBlank(u16, addr = 0x1C, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    Rce0(u16, addr = 0x20, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    Rce1(u16, addr = 0x21, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    Rce2(u16, addr = 0x22, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    Dtcd(u16, addr = 0x23, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    Rs(u16, addr = 0x24, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    RsMixFactor(u16, addr = 0x25, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    RsMax(u16, addr = 0x26, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    RsMin(u16, addr = 0x27, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    VoltCal(u16, addr = 0x28, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    CurrCal(u16, addr = 0x29, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    IocvMan(u16, addr = 0x2E, default = 0x0000) {
        value(pos = 0, width = 16): u16
    }
    SoftReset(u16, addr = 0x90, default = 0x0000) {
        code(pos = 0, width = 16): u16
    }
}
