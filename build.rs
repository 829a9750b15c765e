fn main() {
    // Propagate ESP-IDF link arguments only for flash builds; host builds
    // (tests, simulation) have nothing to emit.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
