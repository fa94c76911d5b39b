fn main() {
    std::process::exit(layercut_cli::run());
}
