#[cfg(test)]
mod audit {
    mod fakes;
    mod integration;
}
