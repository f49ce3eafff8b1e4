fn main() {
    esglens_lib::run()
}
