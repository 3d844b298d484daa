use crate::processing::detectors::pulse::{PulseDetector, PulseDetectorConfig};

use std::os::raw::c_void;

// C surface for acquisition firmware hosts. The detector is handed out as an
// opaque pointer and every call goes through it; ownership stays with the
// caller until delete_pulse_detector.

#[no_mangle]
pub extern "C" fn create_pulse_detector(threshold: f64) -> *mut c_void {
    let config = PulseDetectorConfig {
        id: "pulse".to_string(),
        threshold,
    };
    let detector = Box::new(PulseDetector::new(config));
    Box::into_raw(detector) as *mut c_void
}

#[no_mangle]
pub extern "C" fn delete_pulse_detector(detector_ptr: *mut c_void) {
    if !detector_ptr.is_null() {
        unsafe {
            drop(Box::from_raw(detector_ptr as *mut PulseDetector));
        }
    }
}

#[no_mangle]
pub extern "C" fn pulse_detector_reset(detector_ptr: *mut c_void) {
    if detector_ptr.is_null() {
        return;
    }
    let detector = unsafe { &mut *(detector_ptr as *mut PulseDetector) };
    detector.reset();
}

#[no_mangle]
pub extern "C" fn pulse_detector_set_threshold(detector_ptr: *mut c_void, threshold: f64) {
    if detector_ptr.is_null() {
        return;
    }
    let detector = unsafe { &mut *(detector_ptr as *mut PulseDetector) };
    detector.set_threshold(threshold);
}

#[no_mangle]
pub extern "C" fn pulse_detector_process_sample(
    detector_ptr: *mut c_void,
    voltage: f64,
    elapsed_ms: u32,
) {
    if detector_ptr.is_null() {
        return;
    }
    let detector = unsafe { &mut *(detector_ptr as *mut PulseDetector) };
    detector.process_sample(voltage, elapsed_ms);
}

#[no_mangle]
pub extern "C" fn pulse_detector_latest_sample(detector_ptr: *mut c_void) -> f64 {
    if detector_ptr.is_null() {
        return 0.0;
    }
    let detector = unsafe { &*(detector_ptr as *mut PulseDetector) };
    detector.latest_sample()
}

#[no_mangle]
pub extern "C" fn pulse_detector_beats_per_minute(detector_ptr: *mut c_void) -> u8 {
    if detector_ptr.is_null() {
        return 0;
    }
    let detector = unsafe { &*(detector_ptr as *mut PulseDetector) };
    detector.beats_per_minute()
}

#[no_mangle]
pub extern "C" fn pulse_detector_inter_beat_interval(detector_ptr: *mut c_void) -> u32 {
    if detector_ptr.is_null() {
        return 0;
    }
    let detector = unsafe { &*(detector_ptr as *mut PulseDetector) };
    detector.inter_beat_interval()
}

#[no_mangle]
pub extern "C" fn pulse_detector_saw_start_of_beat(detector_ptr: *mut c_void) -> bool {
    if detector_ptr.is_null() {
        return false;
    }
    let detector = unsafe { &mut *(detector_ptr as *mut PulseDetector) };
    detector.saw_start_of_beat()
}

#[no_mangle]
pub extern "C" fn pulse_detector_is_inside_beat(detector_ptr: *mut c_void) -> bool {
    if detector_ptr.is_null() {
        return false;
    }
    let detector = unsafe { &*(detector_ptr as *mut PulseDetector) };
    detector.is_inside_beat()
}

#[no_mangle]
pub extern "C" fn pulse_detector_pulse_amplitude(detector_ptr: *mut c_void) -> f64 {
    if detector_ptr.is_null() {
        return 0.0;
    }
    let detector = unsafe { &*(detector_ptr as *mut PulseDetector) };
    detector.pulse_amplitude()
}

#[no_mangle]
pub extern "C" fn pulse_detector_last_beat_time(detector_ptr: *mut c_void) -> u64 {
    if detector_ptr.is_null() {
        return 0;
    }
    let detector = unsafe { &*(detector_ptr as *mut PulseDetector) };
    detector.last_beat_time()
}
