#[derive(Debug, Clone, Default)]
pub enum Apn<'a> {
    Given(&'a str),
    /// Empty APN, the network picks one.
    #[default]
    Automatic,
}

impl<'a> Apn<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Apn::Given(apn) => apn,
            Apn::Automatic => "",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct APNInfo<'a> {
    pub apn: Apn<'a>,
    pub user_name: Option<&'a str>,
    pub password: Option<&'a str>,
}

impl<'a> APNInfo<'a> {
    #[must_use]
    pub fn new(apn: &'a str) -> Self {
        Self {
            apn: Apn::Given(apn),
            user_name: None,
            password: None,
        }
    }

    #[must_use]
    pub fn with_credentials(self, user_name: &'a str, password: &'a str) -> Self {
        Self {
            user_name: Some(user_name),
            password: Some(password),
            ..self
        }
    }
}
