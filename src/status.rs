use std::fmt::Display;

use crate::error::{PrinterError, Result};

/// reply to the DLE probe of the ESC framed printers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DleFlags {
    /// ONL, printer is on-line
    pub online: bool,
    /// PE, paper empty
    pub paper_empty: bool,
    /// ERR, mechanism or controller error
    pub controller_error: bool,
}

impl DleFlags {
    pub fn from_byte(dle: u8) -> Self {
        DleFlags {
            online: dle & 4 == 4,
            paper_empty: dle & 2 == 2,
            controller_error: dle & 1 == 1,
        }
    }
}

/// reply to the ENQ probe of the ESC framed printers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqFlags {
    /// FSK, printer is in fiscal mode
    pub fiscal_mode: bool,
    /// CMD, last command was executed
    pub last_command_ok: bool,
    /// PAR, a transaction is open
    pub in_transaction: bool,
    /// TRF, last transaction was completed
    pub last_transfer_ok: bool,
}

impl EnqFlags {
    pub fn from_byte(enq: u8) -> Self {
        EnqFlags {
            fiscal_mode: enq & 8 == 8,
            last_command_ok: enq & 4 == 4,
            in_transaction: enq & 2 == 2,
            last_transfer_ok: enq & 1 == 1,
        }
    }
}

/// link state as known after the last probe cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatus {
    pub connected: bool,
    pub dle: DleFlags,
    pub enq: EnqFlags,
}

impl Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = [
            (!self.connected, "NOT FOUND"),
            (self.dle.online, "ONL"),
            (self.dle.paper_empty, "PE"),
            (self.dle.controller_error, "ERR"),
            (self.enq.fiscal_mode, "FSK"),
            (self.enq.last_command_ok, "CMD"),
            (self.enq.in_transaction, "PAR"),
            (self.enq.last_transfer_ok, "TRF"),
        ];
        let names: Vec<&str> = flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(" "))
    }
}

/// `ds` field of the Posnet 1.01 `sdev` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Ready,
    Menu,
    WaitingForKey,
    WaitingForUserAfterError,
    Unknown(u32),
}

impl DeviceState {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => DeviceState::Ready,
            1 => DeviceState::Menu,
            2 => DeviceState::WaitingForKey,
            3 => DeviceState::WaitingForUserAfterError,
            other => DeviceState::Unknown(other),
        }
    }

    /// fail with a device fault unless the device accepts commands
    pub fn check(&self) -> Result<()> {
        match self {
            DeviceState::Ready => Ok(()),
            _ => Err(PrinterError::DeviceFault(self.to_string())),
        }
    }
}

impl Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::Ready => write!(f, "ready"),
            DeviceState::Menu => write!(f, "device is in menu mode"),
            DeviceState::WaitingForKey => write!(f, "device is waiting for a key press"),
            DeviceState::WaitingForUserAfterError => {
                write!(f, "device is waiting for user reaction after an error")
            }
            DeviceState::Unknown(code) => write!(f, "unknown device state {}", code),
        }
    }
}

/// `pr` field of the Posnet 1.01 `sprn` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MechanismState {
    Ok,
    LeverRaised,
    NoMechanismAccess,
    CoverOpen,
    NoPaperCopy,
    NoPaperOriginal,
    BadTemperatureOrPower,
    PowerDip,
    CutterError,
    PowerSupplyError,
    CoverRaisedWhileCutting,
    Unknown(u32),
}

impl MechanismState {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => MechanismState::Ok,
            1 => MechanismState::LeverRaised,
            2 => MechanismState::NoMechanismAccess,
            3 => MechanismState::CoverOpen,
            4 => MechanismState::NoPaperCopy,
            5 => MechanismState::NoPaperOriginal,
            6 => MechanismState::BadTemperatureOrPower,
            7 => MechanismState::PowerDip,
            8 => MechanismState::CutterError,
            9 => MechanismState::PowerSupplyError,
            10 => MechanismState::CoverRaisedWhileCutting,
            other => MechanismState::Unknown(other),
        }
    }

    pub fn check(&self) -> Result<()> {
        match self {
            MechanismState::Ok => Ok(()),
            _ => Err(PrinterError::DeviceFault(self.to_string())),
        }
    }
}

impl Display for MechanismState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            MechanismState::Ok => "ok",
            MechanismState::LeverRaised => "lever raised",
            MechanismState::NoMechanismAccess => "no access to the printing mechanism",
            MechanismState::CoverOpen => "cover open",
            MechanismState::NoPaperCopy => "no paper, copy",
            MechanismState::NoPaperOriginal => "no paper, original",
            MechanismState::BadTemperatureOrPower => "bad temperature or power",
            MechanismState::PowerDip => "power dip",
            MechanismState::CutterError => "cutter error",
            MechanismState::PowerSupplyError => "power supply error",
            MechanismState::CoverRaisedWhileCutting => "cover raised while cutting",
            MechanismState::Unknown(code) => return write!(f, "unknown mechanism state {}", code),
        };
        write!(f, "{}", text)
    }
}

/// what to do after evaluating the Elzab status bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// retry later
    NotReady,
    /// printing stopped for lack of paper, the resume command must be sent before retrying
    Resume,
}

/// (byte, mask, description) of every Elzab status condition
const ELZAB_CONDITIONS: [(usize, u8, &str); 16] = [
    (1, 1, "no free space in the name and rate database"),
    (1, 2, "a document is pending in memory"),
    (1, 4, "less than 30 records left in fiscal memory"),
    (1, 8, "daily report for the previous sales day is missing"),
    (1, 16, "RAM error, memory was cleared"),
    (1, 32, "article name blocked on the receipt"),
    (1, 64, "no customer display"),
    (1, 128, "no communication with the printer controller"),
    (2, 1, "print buffer not empty"),
    (2, 2, "no paper or head raised"),
    (2, 4, "printer failure"),
    (2, 8, "backup battery voltage too low"),
    (2, 16, "receipt was cancelled"),
    (2, 32, "less than 1 kB of receipt memory left"),
    (2, 64, "printing stopped for lack of paper"),
    (2, 128, "no communication with the printer controller"),
];

/// the five status bytes of the Elzab printers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElzabStatus {
    pub bytes: [u8; 5],
}

impl ElzabStatus {
    pub fn new(bytes: [u8; 5]) -> Self {
        ElzabStatus { bytes }
    }

    /// descriptions of every set condition bit
    pub fn conditions(&self) -> Vec<&'static str> {
        ELZAB_CONDITIONS
            .iter()
            .filter(|(index, mask, _)| self.bytes[*index] & mask == *mask)
            .map(|(_, _, text)| *text)
            .collect()
    }

    /// decide whether a receipt can be started
    ///
    /// # Notes
    ///
    /// Missing paper and a missing daily report are fatal device faults. Conditions not listed here
    /// are advisory only.
    pub fn readiness(&self) -> Result<Readiness> {
        let [_, byte1, byte2, _, _] = self.bytes;
        if byte2 & 2 == 2 {
            return Err(PrinterError::DeviceFault(String::from(
                "no paper or head raised",
            )));
        }
        if byte1 & 8 == 8 {
            return Err(PrinterError::DeviceFault(String::from(
                "daily report for the previous sales day is missing",
            )));
        }
        if byte2 & 64 == 64 {
            return Ok(Readiness::Resume);
        }
        if byte1 & 2 == 2 || byte2 & 1 == 1 {
            return Ok(Readiness::NotReady);
        }
        Ok(Readiness::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_flags() {
        let dle = DleFlags::from_byte(0x74);
        assert!(dle.online);
        assert!(!dle.paper_empty);
        let enq = EnqFlags::from_byte(0x6A);
        assert!(enq.fiscal_mode);
        assert!(enq.in_transaction);
        assert!(!enq.last_command_ok);
        let status = LinkStatus {
            connected: true,
            dle,
            enq,
        };
        assert_eq!(status.to_string(), "ONL FSK PAR");
        assert_eq!(LinkStatus::default().to_string(), "NOT FOUND");
    }

    #[test]
    fn test_posnet_states() {
        assert!(DeviceState::from_code(0).check().is_ok());
        assert!(DeviceState::from_code(2).check().is_err());
        assert_eq!(MechanismState::from_code(4), MechanismState::NoPaperCopy);
        let err = MechanismState::from_code(4).check().unwrap_err();
        assert_eq!(err.to_string(), "device fault: no paper, copy");
        assert_eq!(
            MechanismState::from_code(42).to_string(),
            "unknown mechanism state 42"
        );
    }

    #[test]
    fn test_elzab_readiness() -> Result<()> {
        assert_eq!(ElzabStatus::new([0; 5]).readiness()?, Readiness::Ready);
        assert_eq!(
            ElzabStatus::new([0, 2, 0, 0, 0]).readiness()?,
            Readiness::NotReady
        );
        assert_eq!(
            ElzabStatus::new([0, 0, 64, 0, 0]).readiness()?,
            Readiness::Resume
        );
        // advisory only
        assert_eq!(
            ElzabStatus::new([0, 4, 8, 0, 0]).readiness()?,
            Readiness::Ready
        );
        assert!(ElzabStatus::new([0, 8, 0, 0, 0]).readiness().is_err());
        assert!(ElzabStatus::new([0, 0, 66, 0, 0]).readiness().is_err());
        Ok(())
    }

    #[test]
    fn test_elzab_conditions() {
        let status = ElzabStatus::new([0xFF, 0x04, 0x01, 0xFF, 0xFF]);
        assert_eq!(
            status.conditions(),
            vec![
                "less than 30 records left in fiscal memory",
                "print buffer not empty"
            ]
        );
    }
}
