fn main() {
    // ESP-IDF link arguments are only needed for the firmware image; host
    // builds (tests, fuzzing) compile without the toolchain environment.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
