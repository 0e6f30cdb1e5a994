fn main() {
    screenshoter::run()
}
