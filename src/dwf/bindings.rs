#![allow(non_snake_case, non_camel_case_types, dead_code)]

use std::os::raw::{c_char, c_double, c_int, c_uchar};

pub type HDWF = c_int;
pub type BOOL = c_int;
pub type DWFERC = c_int;
pub type DEVID = c_int;
pub type DEVVER = c_int;
pub type ACQMODE = c_int;
pub type STS = c_uchar;

pub const hdwfNone: HDWF = 0;
/// Capacity the SDK expects for range step arrays
pub const RANGE_STEPS_LEN: usize = 32;
/// Enumeration filter matching every device family
pub const enumfilterAll: c_int = 0;

unsafe extern "C" {
    pub fn FDwfGetLastError(pdwferc: *mut DWFERC) -> BOOL;
    pub fn FDwfGetLastErrorMsg(szError: *mut c_char) -> BOOL;
    pub fn FDwfGetVersion(szVersion: *mut c_char) -> BOOL;

    pub fn FDwfEnum(enumfilter: c_int, pcDevice: *mut c_int) -> BOOL;
    pub fn FDwfEnumDeviceType(idxDevice: c_int, pDeviceId: *mut DEVID, pDeviceRevision: *mut DEVVER)
    -> BOOL;
    pub fn FDwfEnumDeviceName(idxDevice: c_int, szDeviceName: *mut c_char) -> BOOL;
    pub fn FDwfEnumSN(idxDevice: c_int, szSN: *mut c_char) -> BOOL;

    pub fn FDwfDeviceOpen(idxDevice: c_int, phdwf: *mut HDWF) -> BOOL;
    pub fn FDwfDeviceClose(hdwf: HDWF) -> BOOL;
    pub fn FDwfDeviceCloseAll() -> BOOL;
    pub fn FDwfDeviceAutoConfigureSet(hdwf: HDWF, fAutoConfigure: c_int) -> BOOL;

    pub fn FDwfAnalogInConfigure(hdwf: HDWF, fReconfigure: c_int, fStart: c_int) -> BOOL;
    pub fn FDwfAnalogInStatus(hdwf: HDWF, fReadData: c_int, psts: *mut STS) -> BOOL;
    pub fn FDwfAnalogInStatusData(
        hdwf: HDWF,
        idxChannel: c_int,
        rgdVoltData: *mut c_double,
        cdData: c_int,
    ) -> BOOL;
    pub fn FDwfAnalogInStatusRecord(
        hdwf: HDWF,
        pcdDataAvailable: *mut c_int,
        pcdDataLost: *mut c_int,
        pcdDataCorrupt: *mut c_int,
    ) -> BOOL;
    pub fn FDwfAnalogInFrequencyInfo(hdwf: HDWF, phzMin: *mut c_double, phzMax: *mut c_double)
    -> BOOL;
    pub fn FDwfAnalogInFrequencySet(hdwf: HDWF, hzFrequency: c_double) -> BOOL;
    pub fn FDwfAnalogInRecordLengthSet(hdwf: HDWF, sLength: c_double) -> BOOL;
    pub fn FDwfAnalogInAcquisitionModeSet(hdwf: HDWF, acqmode: ACQMODE) -> BOOL;
    pub fn FDwfAnalogInAcquisitionModeGet(hdwf: HDWF, pacqmode: *mut ACQMODE) -> BOOL;
    pub fn FDwfAnalogInChannelCount(hdwf: HDWF, pcChannel: *mut c_int) -> BOOL;
    pub fn FDwfAnalogInChannelEnableSet(hdwf: HDWF, idxChannel: c_int, fEnable: c_int) -> BOOL;
    pub fn FDwfAnalogInChannelRangeSteps(
        hdwf: HDWF,
        rgVoltsStep: *mut c_double,
        pnSteps: *mut c_int,
    ) -> BOOL;
    pub fn FDwfAnalogInChannelRangeSet(hdwf: HDWF, idxChannel: c_int, voltsRange: c_double)
    -> BOOL;
}
